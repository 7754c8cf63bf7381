pub mod forecast;
pub mod snow;

pub use forecast::{
    Coordinate, DailyRecord, ForecastRequest, HourlyRecord, MergedForecastResult, ModelChoice,
};
pub use snow::SnowAccumulationArtifact;
