use crate::db::Storage;
use crate::error::{Error, ErrorKind};
use crate::settings::Settings;

/// Run a command given on the command line instead of a crawl. `args` are
/// the arguments after the program name.
pub async fn handle_command(args: &[String], storage: &Storage) -> Result<(), Error> {
    let Some(command) = args.first() else {
        return help();
    };

    println!("\n*** twistmap is running in command mode ***");
    println!("*** COMMAND = {} ***\n", command);

    match command.as_str() {
        "help" => help()?,
        "set" => set(&args[1..], storage).await?,
        "show_settings" => show_settings(storage).await?,
        other => println!("Unknown command {}", other),
    }

    Ok(())
}

pub fn help() -> Result<(), Error> {
    println!("twistmap");
    println!("    crawl the ledger, refresh stale profiles and geolocate them");
    println!("twistmap help");
    println!("    show this list");
    println!("twistmap set <key> <value>");
    println!("    change a setting in the database");
    println!("twistmap show_settings");
    println!("    print the settings stored in the database");

    Ok(())
}

pub async fn set(args: &[String], storage: &Storage) -> Result<(), Error> {
    let (key, value) = match args {
        [key, value] => (key, value),
        _ => {
            return Err(ErrorKind::Usage(
                "Expected a key and a value".to_owned(),
                "set <key> <value>".to_owned(),
            )
            .into())
        }
    };

    // Environment overrides are not applied here, so they never get saved
    let mut settings = Settings::load(storage).await?;
    settings.set(key, value)?;
    settings.save(storage).await?;
    println!("{} saved", key);

    Ok(())
}

pub async fn show_settings(storage: &Storage) -> Result<(), Error> {
    let settings = Settings::load(storage).await?;
    for (key, value) in settings.describe() {
        println!("{} = {}", key, value);
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_set_command_persists() {
        let storage = Storage::open_in_memory().unwrap();
        handle_command(&args(&["set", "refresh_ttl_secs", "3600"]), &storage)
            .await
            .unwrap();
        handle_command(&args(&["set", "geocoder_url", "http://localhost:8080/search"]), &storage)
            .await
            .unwrap();

        let settings = Settings::load(&storage).await.unwrap();
        assert_eq!(settings.refresh_ttl_secs, 3600);
        assert_eq!(settings.geocoder_url, "http://localhost:8080/search");
        assert_eq!(settings.checkpoint_every, Settings::default().checkpoint_every);
    }

    #[tokio::test]
    async fn test_set_command_rejects_bad_input() {
        let storage = Storage::open_in_memory().unwrap();
        assert!(handle_command(&args(&["set", "refresh_ttl_secs"]), &storage)
            .await
            .is_err());
        assert!(handle_command(&args(&["set", "refresh_ttl_secs", "soon"]), &storage)
            .await
            .is_err());
        assert_eq!(storage.fetch_setting("refresh_ttl_secs").await.unwrap(), None);
    }
}
