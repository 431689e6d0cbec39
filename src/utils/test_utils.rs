//! Test utilities shared by the ledger and VM test suites.
