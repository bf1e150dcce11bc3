use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub logs: bool,
    pub colored_logs: bool,
    pub writeable_path: String,
}
