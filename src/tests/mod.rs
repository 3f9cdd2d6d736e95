#![cfg(test)]

mod boundary;
mod lock;
