pub mod providers;

pub mod models;

pub mod pawmatch;
