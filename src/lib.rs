// src/lib.rs

pub mod models {
    pub mod fundamentals;
    pub mod price_row;
    pub mod pulse;
    pub mod sector;
}

pub mod services {
    pub mod breadth;
    pub mod fundamentals;
    pub mod index_approx;
    pub mod market_pulse;
    pub mod prev_close;
    pub mod sector_index;
    pub mod snapshot_store;
}

pub mod jobs;
