pub mod sync_state;
