use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `get_books_tool` takes no arguments.
#[derive(Debug, Default, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetBooksParams {}
