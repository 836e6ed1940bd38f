use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let url = || clap::arg!(<URL> "Source URL");

    let mut cmd = clap::Command::new("estela")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Estela Contributors")
        .about("Capture web articles into versioned snapshots")
        .subcommand_required(true)
        .arg(
            clap::arg!(--config <FILE> "Pipeline configuration file")
                .global(true)
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(--store <DIR> "Snapshot store directory")
                .global(true)
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").global(true).default_value("20"))
        .arg(clap::arg!(--user_agent <UA> "Custom User-Agent for HTTP requests").global(true))
        .arg(clap::arg!(-v --verbose "Enable debug logging").global(true))
        .subcommand(
            clap::Command::new("capture")
                .about("Run one capture cycle")
                .arg(clap::arg!(<INPUT> "URL to fetch, local HTML file, or '-' for stdin"))
                .arg(clap::arg!(--url <URL> "Source URL to record the capture under"))
                .arg(clap::arg!(--print "Print the rendered artifact of a new version to stdout")),
        )
        .subcommand(
            clap::Command::new("watch")
                .about("Capture sources repeatedly")
                .arg(clap::arg!(<URL>... "Source URLs to poll"))
                .arg(clap::arg!(--every <SECS> "Seconds between rounds").default_value("900"))
                .arg(clap::arg!(--rounds <N> "Stop after this many rounds")),
        )
        .subcommand(clap::Command::new("history").about("List the stored versions of a source").arg(url()))
        .subcommand(
            clap::Command::new("show")
                .about("Print the markdown artifact of a stored version")
                .arg(url())
                .arg(clap::arg!(--version <N> "Version to show (default: latest)")),
        );

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "estela", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "estela", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "estela", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "estela", &completions_dir).unwrap();

    println!("cargo:warning=Shell completions generated in: {}", completions_dir.display());
}
