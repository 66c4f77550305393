use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetStatsParams {
    /// Names are checked at dispatch time; unknown ones are dropped, not rejected.
    #[schemars(
        description = "An optional list of strings specifying which statistics to retrieve. If empty or not provided, a default set of common statistics will be returned."
    )]
    pub requested_stats: Option<Vec<String>>,
}
