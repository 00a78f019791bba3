mod build_tests;
mod common;
mod dependency_tests;
mod gc_tests;
mod package_tests;
mod revision_tests;
mod sdk_tests;
