mod factor_graph_builder_tests;
mod random_tree_test;
mod utils;
