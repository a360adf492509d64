mod compositor;
mod xdg_shell;
