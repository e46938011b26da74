//! RPC method name constants, shared by the client and server sides of the
//! transport so the two never drift.

pub mod base {
    pub const INITIALIZE: &str = "Initialize";
    pub const EXECUTE: &str = "Execute";
    pub const HEALTH: &str = "Health";
    pub const SHUTDOWN: &str = "Shutdown";
    pub const GET_INFO: &str = "GetInfo";
    pub const LIST_COMMANDS: &str = "ListCommands";
}

pub mod datastore {
    pub const STORE: &str = "Store";
    pub const RETRIEVE: &str = "Retrieve";
    pub const QUERY: &str = "Query";
    pub const DELETE: &str = "Delete";
    pub const LIST: &str = "List";
    pub const TEST_CONNECTION: &str = "TestConnection";
    pub const GET_STATS: &str = "GetStats";
}
