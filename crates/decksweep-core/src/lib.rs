pub mod deck;
pub mod domain;
pub mod grid;
pub mod iterations;
pub mod materialize;
pub mod schedule;
pub mod sweep;
pub mod timestep;
