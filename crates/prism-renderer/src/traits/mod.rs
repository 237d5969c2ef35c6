//! Core traits for draw targets.
//!
//! A draw target is anything a draw can land in: an offscreen
//! [`Framebuffer`](crate::framebuffer::Framebuffer) or the on-screen
//! [`CanvasFramebuffer`](crate::canvas::CanvasFramebuffer).

mod draw_target;

pub use draw_target::*;
