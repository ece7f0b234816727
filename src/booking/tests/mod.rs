mod common;

mod availability;
mod inventory;
