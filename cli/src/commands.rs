pub mod schematize;
