#![cfg(loom)]

mod proc_table;
