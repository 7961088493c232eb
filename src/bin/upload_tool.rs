//! Upload tool
//!
//! A command-line front end uploading local files to an action API endpoint,
//! either directly or through the stash.

use clap::{Arg, ArgMatches, Command};
use std::sync::Arc;
use upload_client::{
    Blob, HttpApiClient, LogLevel, UploadConfig, UploadFields, UploadOptions, Uploader,
};

fn file_args(cmd: Command) -> Command {
    cmd.arg(Arg::new("path").help("File to upload").required(true))
        .arg(
            Arg::new("filename")
                .long("filename")
                .help("Target file name (defaults to the local file name)"),
        )
        .arg(Arg::new("comment").long("comment").help("Upload summary"))
        .arg(Arg::new("text").long("text").help("Initial page text"))
        .arg(
            Arg::new("ignore-warnings")
                .long("ignore-warnings")
                .help("Ignore server warnings")
                .action(clap::ArgAction::SetTrue),
        )
}

fn cli() -> Command {
    Command::new("upload-tool")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Upload files to an action API endpoint")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("JSON configuration file")
                .global(true),
        )
        .arg(
            Arg::new("endpoint")
                .short('e')
                .long("endpoint")
                .help("API endpoint URL, overrides the configuration")
                .global(true),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .help("Log in as this user before uploading")
                .requires("password")
                .global(true),
        )
        .arg(
            Arg::new("password")
                .long("password")
                .help("Password for --user")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Verbose output")
                .action(clap::ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(file_args(
            Command::new("upload").about("Upload a file in one request"),
        ))
        .subcommand(file_args(
            Command::new("stash").about("Upload a file into the stash, then commit it"),
        ))
}

fn load_config(matches: &ArgMatches) -> Result<UploadConfig, Box<dyn std::error::Error>> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => UploadConfig::from_json_file(path)?,
        None => UploadConfig::default(),
    };
    if let Some(endpoint) = matches.get_one::<String>("endpoint") {
        config.endpoint = endpoint.clone();
    }
    if matches.get_flag("verbose") {
        config.log_level = Some(LogLevel::Debug);
    }
    config.validate()?;
    Ok(config)
}

fn upload_fields(matches: &ArgMatches, blob: &Blob) -> UploadFields {
    let filename = matches
        .get_one::<String>("filename")
        .map(String::as_str)
        .or(blob.name())
        .unwrap_or_default();

    let mut fields = UploadFields::new()
        .set("filename", filename)
        .flag("ignorewarnings", matches.get_flag("ignore-warnings"));
    if let Some(comment) = matches.get_one::<String>("comment") {
        fields.insert("comment", comment.clone());
    }
    if let Some(text) = matches.get_one::<String>("text") {
        fields.insert("text", text.clone());
    }
    fields
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = cli().get_matches();
    let config = load_config(&matches)?;

    env_logger::Builder::new()
        .filter_level(config.log_level.unwrap_or_default().to_level_filter())
        .parse_default_env()
        .init();

    let api = Arc::new(HttpApiClient::new(config)?);
    if let (Some(user), Some(password)) = (
        matches.get_one::<String>("user"),
        matches.get_one::<String>("password"),
    ) {
        api.login(user, password).await?;
    }
    let uploader = Uploader::new(api);

    let options = UploadOptions::new().on_progress(|progress| {
        eprint!("\rUpload progress: {:>3}%", (progress.fraction * 100.0) as u32);
        if progress.is_complete() {
            eprintln!();
        }
    });

    let result = match matches.subcommand() {
        Some(("upload", sub_matches)) => {
            let path = sub_matches
                .get_one::<String>("path")
                .ok_or("missing file path")?;
            let blob = Blob::from_path(path).await?;
            let fields = upload_fields(sub_matches, &blob);
            uploader.upload(blob, fields, &options).await?
        }
        Some(("stash", sub_matches)) => {
            let path = sub_matches
                .get_one::<String>("path")
                .ok_or("missing file path")?;
            let blob = Blob::from_path(path).await?;
            let fields = upload_fields(sub_matches, &blob);
            let finish = uploader.upload_to_stash(blob, fields, &options).await?;
            println!("Stashed as {}", finish.filekey());
            finish.finish(UploadFields::new()).await?
        }
        _ => {
            eprintln!("No subcommand provided. Use --help for usage information.");
            std::process::exit(1);
        }
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
