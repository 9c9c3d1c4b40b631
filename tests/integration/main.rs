//! Integration tests: full cycles against a scripted slip driver.

mod cycle;
mod mock_driver;
mod simulation;
