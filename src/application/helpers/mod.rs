pub mod domain_parsing;
