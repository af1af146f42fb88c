pub mod theme_handlers;
