pub mod event_closer;
