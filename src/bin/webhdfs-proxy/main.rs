use clap::{App, Arg};
use webhdfs_proxy::config::Config;
use webhdfs_proxy::logger;

mod server;

use server::*;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let build_time = option_env!("WEBHDFS_PROXY_BUILD_TIME");
    let version_info = webhdfs_proxy::version::version_info(build_time);

    let matches = App::new("webhdfs-proxy")
        .about("A WebHDFS/HttpFS proxy with a per-operation request catalog")
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(version_info.as_str())
        .long_version(version_info.as_str())
        .help_template(
            "\
            {before-help}{bin} - {about}\n\
            {version}\n\n\
            {usage-heading}\n    {usage}\n\
            \n\
            {all-args}{after-help}\
        ",
        )
        .subcommand(
            App::new("server")
                .about("Run the proxy server")
                .arg(
                    Arg::new("address")
                        .long("address")
                        .takes_value(true)
                        .value_name("ADDR")
                        .help("Bind to a specific ADDRESS:PORT, overrides the configured address"),
                )
                .arg(
                    Arg::new("quiet")
                        .short('q')
                        .long("quiet")
                        .help("Disable startup information"),
                ),
        )
        .get_matches();

    logger::init()?;

    match matches.subcommand() {
        Some(("server", sub_m)) => {
            let mut config = Config::from_env()?;
            if let Some(address) = sub_m.value_of("address") {
                config.listen_address = address.to_owned();
            }
            let quiet = sub_m.is_present("quiet");
            Server::new(config, quiet).run().await
        }
        _ => {
            eprintln!("No command given, try `webhdfs-proxy server`");
            Ok(())
        }
    }
}
