//! The conversational side: model client, tools, and the persona loop.

pub mod model;
pub mod openai;
pub mod persona;
pub mod tools;
