use clap::{Arg, ArgAction, Command};

pub fn build_cli() -> Command {
    Command::new("quiesce")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Inspect sweeper dependency plans and effective wait/sweep configuration")
        .long_about("quiesce plans dependency-ordered cleanup of remote test resources. Sweepers are declared in a TOML file with their dependencies; 'plan' shows the waves a sweep would run in, and 'config' shows the merged configuration a run would use.")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("plan")
                .about("Show the execution waves for a sweeper declaration file")
                .arg(
                    Arg::new("graph")
                        .help("TOML file with [[sweeper]] entries (name, dependencies)")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("only")
                        .long("only")
                        .short('o')
                        .help("Comma-separated sweepers to run, plus their dependencies (overrides config)")
                        .value_delimiter(',')
                        .num_args(1),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Output in JSON format")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Show the effective configuration after merging all sources")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Output in JSON format")
                        .action(ArgAction::SetTrue),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_build() {
        let app = build_cli();
        assert_eq!(app.get_name(), "quiesce");
        app.debug_assert();
    }

    #[test]
    fn test_plan_only_is_comma_separated() {
        let matches = build_cli()
            .try_get_matches_from(vec!["quiesce", "plan", "sweepers.toml", "--only", "vpc,subnet"])
            .unwrap();
        let plan = matches.subcommand_matches("plan").unwrap();
        let only: Vec<&String> = plan.get_many::<String>("only").unwrap().collect();
        assert_eq!(only, vec!["vpc", "subnet"]);
        assert_eq!(plan.get_one::<String>("graph").unwrap(), "sweepers.toml");
        assert!(!plan.get_flag("json"));
    }

    #[test]
    fn test_verbose_is_global() {
        let matches = build_cli()
            .try_get_matches_from(vec!["quiesce", "config", "-v", "--json"])
            .unwrap();
        assert!(matches.get_flag("verbose"));
        assert!(matches.subcommand_matches("config").unwrap().get_flag("json"));
    }

    #[test]
    fn test_plan_requires_graph() {
        let result = build_cli().try_get_matches_from(vec!["quiesce", "plan"]);
        assert!(result.is_err());
    }
}
