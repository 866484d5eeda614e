pub mod variant_dataset;
