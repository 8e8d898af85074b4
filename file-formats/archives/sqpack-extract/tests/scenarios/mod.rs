//! End-to-end extraction runs over whole patch sequences

mod end_to_end;
