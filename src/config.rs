use crate::domain::{Address, Asset, Wad};
use crate::engine::{MarketSetup, ParamValues};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub owner: Address,
    pub amm_address: Address,
    pub pool_address: Address,
    pub index_updaters: Vec<Address>,
    pub assets: Vec<Asset>,
    pub params: ParamValues,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let owner = env_map
            .get("OWNER_ADDRESS")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(Address::new)
            .ok_or_else(|| ConfigError::MissingEnv("OWNER_ADDRESS".to_string()))?;

        let amm_address = Address::new(
            env_map
                .get("AMM_ADDRESS")
                .map(|s| s.as_str())
                .unwrap_or("milton"),
        );
        let pool_address = Address::new(
            env_map
                .get("POOL_ADDRESS")
                .map(|s| s.as_str())
                .unwrap_or("joseph"),
        );
        if amm_address == pool_address {
            return Err(ConfigError::InvalidValue(
                "POOL_ADDRESS".to_string(),
                "must differ from AMM_ADDRESS".to_string(),
            ));
        }

        let index_updaters = env_map
            .get("INDEX_UPDATERS")
            .map(|s| {
                s.split(',')
                    .map(|a| a.trim())
                    .filter(|a| !a.is_empty())
                    .map(Address::new)
                    .collect()
            })
            .unwrap_or_default();

        let assets = parse_assets_from_map(&env_map)?;

        let mut params = ParamValues::default();
        if let Some(v) = parse_wad(&env_map, "OPENING_FEE_PERCENTAGE")? {
            params.opening_fee_percentage = require_fraction("OPENING_FEE_PERCENTAGE", v)?;
        }
        if let Some(v) = parse_wad(&env_map, "INCOME_TAX_PERCENTAGE")? {
            params.income_tax_percentage = require_fraction("INCOME_TAX_PERCENTAGE", v)?;
        }
        if let Some(v) = parse_wad(&env_map, "LIQUIDATION_DEPOSIT_AMOUNT")? {
            params.liquidation_deposit_amount = v;
        }
        if let Some(v) = parse_wad(&env_map, "IPOR_PUBLICATION_FEE_AMOUNT")? {
            params.ipor_publication_fee_amount = v;
        }

        Ok(Config {
            port,
            owner,
            amm_address,
            pool_address,
            index_updaters,
            assets,
            params,
        })
    }

    pub fn market_setup(&self) -> MarketSetup {
        MarketSetup {
            owner: self.owner.clone(),
            amm: self.amm_address.clone(),
            pool: self.pool_address.clone(),
            index_updaters: self.index_updaters.clone(),
            params: self.params,
        }
    }
}

fn parse_wad(env_map: &HashMap<String, String>, key: &str) -> Result<Option<Wad>, ConfigError> {
    env_map
        .get(key)
        .map(|s| {
            Wad::from_decimal_str(s)
                .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
        })
        .transpose()
}

fn require_fraction(key: &str, value: Wad) -> Result<Wad, ConfigError> {
    if value > Wad::ONE {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            "must not exceed 1".to_string(),
        ));
    }
    Ok(value)
}

/// One asset per `ID:DECIMALS` entry.
fn parse_asset(entry: &str, key: &str) -> Result<Asset, ConfigError> {
    let invalid = |reason: &str| {
        ConfigError::InvalidValue(key.to_string(), format!("{} in entry {:?}", reason, entry))
    };
    let (id, decimals) = entry
        .split_once(':')
        .ok_or_else(|| invalid("expected ID:DECIMALS"))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(invalid("empty asset id"));
    }
    let decimals = decimals
        .trim()
        .parse::<u8>()
        .map_err(|_| invalid("decimals must be a number"))?;
    Asset::new(id, decimals).ok_or_else(|| invalid("decimals must be at most 18"))
}

fn parse_assets_from_map(env_map: &HashMap<String, String>) -> Result<Vec<Asset>, ConfigError> {
    if let Some(assets_str) = env_map.get("ASSETS") {
        assets_str
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| parse_asset(s, "ASSETS"))
            .collect()
    } else if let Some(file_path) = env_map.get("ASSETS_FILE") {
        let content = std::fs::read_to_string(file_path).map_err(|_| {
            ConfigError::InvalidValue(
                "ASSETS_FILE".to_string(),
                "file not found or unreadable".to_string(),
            )
        })?;
        content
            .lines()
            .map(|line| line.trim())
            .filter(|s| !s.is_empty() && !s.starts_with('#'))
            .map(|s| parse_asset(s, "ASSETS_FILE"))
            .collect()
    } else {
        Ok(Vec::new())
    }
}
