pub mod suggestion_client;
