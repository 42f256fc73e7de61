use crate::entity::Field;
use crate::error::ConfigError;
use clap::Parser;
use pong_shared::{
    CANVAS_HEIGHT, CANVAS_WIDTH, PADDLE_HEIGHT, PADDLE_MARGIN, PADDLE_WIDTH, TICK_RATE,
};
use std::time::Duration;

/// Highest accepted tick rate. Past this the interval period drops below a
/// millisecond.
pub const MAX_TICK_RATE: u32 = 1000;

/// Command line arguments for the game server
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,
    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,
    /// Tick rate (updates per second)
    #[arg(short, long, default_value_t = TICK_RATE)]
    pub tick_rate: u32,
    /// Field width
    #[arg(long, default_value_t = CANVAS_WIDTH)]
    pub width: f32,
    /// Field height
    #[arg(long, default_value_t = CANVAS_HEIGHT)]
    pub height: f32,
    /// Seed for ball launch angles; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Validated server settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub tick_rate: u32,
    pub field: Field,
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            tick_rate: TICK_RATE,
            field: Field::default(),
            seed: None,
        }
    }
}

impl ServerConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        if self.tick_rate > MAX_TICK_RATE {
            return Err(ConfigError::TickRateTooHigh(self.tick_rate));
        }

        let min_width = 2.0 * (PADDLE_MARGIN + PADDLE_WIDTH);
        if !(self.field.width >= min_width && self.field.height >= PADDLE_HEIGHT) {
            return Err(ConfigError::FieldTooSmall {
                width: self.field.width,
                height: self.field.height,
            });
        }

        Ok(())
    }
}

impl TryFrom<Args> for ServerConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let config = ServerConfig {
            bind_addr: format!("{}:{}", args.host, args.port),
            tick_rate: args.tick_rate,
            field: Field::new(args.width, args.height),
            seed: args.seed,
        };
        config.validate()?;
        Ok(config)
    }
}
