mod command;
mod save;
mod store;
mod ui;
mod util;

fn main() -> anyhow::Result<()> {
    command::run()
}
