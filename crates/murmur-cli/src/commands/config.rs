use clap::Subcommand;
use murmur_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "engine.cool_down_secs")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Print the config file path
    Path,
    /// Reset config to defaults
    Reset,
}

fn get(config: &Config, key: &str) -> Option<String> {
    match key {
        "engine.cool_down_secs" => Some(config.engine.cool_down_secs.to_string()),
        "engine.tick_interval_secs" => Some(config.engine.tick_interval_secs.to_string()),
        "engine.max_consecutive_dispatch_failures" => {
            Some(config.engine.max_consecutive_dispatch_failures.to_string())
        }
        "geofence.default_radius_m" => Some(config.geofence.default_radius_m.to_string()),
        "geofence.min_radius_m" => Some(config.geofence.min_radius_m.to_string()),
        "geofence.max_radius_m" => Some(config.geofence.max_radius_m.to_string()),
        "geofence.distance_interval_m" => Some(config.geofence.distance_interval_m.to_string()),
        "notifications.enabled" => Some(config.notifications.enabled.to_string()),
        "notifications.title" => Some(config.notifications.title.clone()),
        "notifications.channel_id" => Some(config.notifications.channel_id.clone()),
        _ => None,
    }
}

fn set(config: &mut Config, key: &str, value: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match key {
        "engine.cool_down_secs" => config.engine.cool_down_secs = value.parse()?,
        "engine.tick_interval_secs" => config.engine.tick_interval_secs = value.parse()?,
        "engine.max_consecutive_dispatch_failures" => {
            config.engine.max_consecutive_dispatch_failures = value.parse()?
        }
        "geofence.default_radius_m" => config.geofence.default_radius_m = value.parse()?,
        "geofence.min_radius_m" => config.geofence.min_radius_m = value.parse()?,
        "geofence.max_radius_m" => config.geofence.max_radius_m = value.parse()?,
        "geofence.distance_interval_m" => config.geofence.distance_interval_m = value.parse()?,
        "notifications.enabled" => config.notifications.enabled = value.parse()?,
        "notifications.title" => config.notifications.title = value.to_string(),
        "notifications.channel_id" => config.notifications.channel_id = value.to_string(),
        _ => return Err(format!("unknown key: {key}").into()),
    }
    config.validate()?;
    Ok(())
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match get(&config, &key) {
                Some(value) => println!("{value}"),
                None => {
                    eprintln!("unknown key: {key}");
                    std::process::exit(1);
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            set(&mut config, &key, &value)?;
            config.save()?;
            println!("ok");
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let json = serde_json::to_string_pretty(&config)?;
            println!("{json}");
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
