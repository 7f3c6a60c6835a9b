pub mod app_state;
pub mod bias;
pub mod io_struct;
pub mod llm_client;
pub mod queue;
pub mod server;
pub mod skills;
pub mod worker;
