pub mod data_cell;
