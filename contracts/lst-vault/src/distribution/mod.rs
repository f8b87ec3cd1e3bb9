/// This module handles how a withdrawal is spread over the LST positions.
/// When the liquid balance does not cover a withdrawal, it decides which positions
/// to unwind and by how much, without touching the chain
pub mod withdraw;
