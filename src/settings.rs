// Copyright 2023 Remi Bernotavicius

use derive_more::Display;
use std::path::PathBuf;

#[derive(clap::ValueEnum, Display, Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Profile {
    #[default]
    #[display("development")]
    Development,
    #[display("production")]
    Production,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub profile: Profile,
    pub database: PathBuf,
    pub api_tokens: Vec<String>,
}

impl Settings {
    pub fn debug(&self) -> bool {
        self.profile == Profile::Development
    }

    pub fn log_level(&self) -> log::LevelFilter {
        match self.profile {
            Profile::Development => log::LevelFilter::Debug,
            Profile::Production => log::LevelFilter::Info,
        }
    }

    pub fn accepts_token(&self, token: &str) -> bool {
        !token.is_empty() && self.api_tokens.iter().any(|t| t == token)
    }
}

#[test]
fn profile_levels() {
    let mut settings = Settings {
        profile: Profile::default(),
        database: PathBuf::from(":memory:"),
        api_tokens: vec!["s3cret".into()],
    };
    assert!(settings.debug());
    assert_eq!(settings.log_level(), log::LevelFilter::Debug);

    settings.profile = Profile::Production;
    assert!(!settings.debug());
    assert_eq!(settings.log_level(), log::LevelFilter::Info);
    assert_eq!(settings.profile.to_string(), "production");
}

#[test]
fn token_check() {
    let settings = Settings {
        profile: Profile::Production,
        database: PathBuf::from(":memory:"),
        api_tokens: vec!["s3cret".into()],
    };
    assert!(settings.accepts_token("s3cret"));
    assert!(!settings.accepts_token("guess"));
    assert!(!settings.accepts_token(""));
}
