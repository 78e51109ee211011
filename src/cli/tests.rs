#[cfg(test)]
mod tests {
    use crate::cli::{Args, prompt_topic};
    use crate::config::{Config, ConfigError, LLMProvider, ProcessMode};
    use clap::Parser;
    use std::path::PathBuf;

    fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("history-buff.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_args_default_values() {
        let args = Args::try_parse_from(["history-buff"]).unwrap();

        assert!(args.topic.is_none());
        assert!(args.config.is_none());
        assert!(args.output_path.is_none());
        assert!(args.process.is_none());
        assert!(!args.telemetry);
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_short_options() {
        let args = Args::try_parse_from([
            "history-buff",
            "-t",
            "Roman Empire",
            "-o",
            "/test/output",
            "-p",
            "hierarchical",
            "-v",
        ])
        .unwrap();

        assert_eq!(args.topic.as_deref(), Some("Roman Empire"));
        assert_eq!(args.output_path, Some(PathBuf::from("/test/output")));
        assert_eq!(args.process, Some(ProcessMode::Hierarchical));
        assert!(args.verbose);
    }

    #[test]
    fn test_args_reject_unknown_process_mode() {
        assert!(Args::try_parse_from(["history-buff", "--process", "parallel"]).is_err());
        assert!(Args::try_parse_from(["history-buff", "--agent-provider", "mistral"]).is_err());
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
output_path = "from-file"
process = "hierarchical"

[agent_llm]
model = "file-model"
"#,
        );

        let args = Args::try_parse_from([
            "history-buff",
            "--config",
            path.to_str().unwrap(),
            "--output-path",
            "from-cli",
            "--agent-model",
            "gpt-4o",
            "--tool-provider",
            "ollama",
            "--tool-model",
            "llama3",
            "--telemetry",
        ])
        .unwrap();
        let config = args.into_config().unwrap();

        assert_eq!(config.output_path, PathBuf::from("from-cli"));
        assert_eq!(config.process, ProcessMode::Hierarchical);
        assert_eq!(config.agent_llm.model, "gpt-4o");
        assert_eq!(config.tool_llm.provider, LLMProvider::Ollama);
        assert_eq!(config.tool_llm.model, "llama3");
        assert!(config.telemetry);
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let args =
            Args::try_parse_from(["history-buff", "--config", "/nonexistent/history-buff.toml"])
                .unwrap();
        assert!(args.into_config().is_err());
    }

    #[test]
    fn test_prompt_topic_reads_one_trimmed_line() {
        let mut prompt = Vec::new();
        let topic = prompt_topic("  Roman Empire \nignored\n".as_bytes(), &mut prompt).unwrap();

        assert_eq!(topic, "Roman Empire");
        assert_eq!(
            String::from_utf8(prompt).unwrap(),
            "Enter the topic for the history report: "
        );
    }

    #[test]
    fn test_resolve_topic_prefers_flag() {
        let args = Args::try_parse_from(["history-buff", "--topic", "Ming Dynasty"]).unwrap();
        let mut prompt = Vec::new();
        let topic = args
            .resolve_topic("Roman Empire\n".as_bytes(), &mut prompt)
            .unwrap();

        assert_eq!(topic, "Ming Dynasty");
        assert!(prompt.is_empty());
    }

    #[test]
    fn test_prepare_run_checks_credentials_before_prompting() {
        let args = Args::try_parse_from(["history-buff"]).unwrap();
        let mut prompt = Vec::new();

        let err = args
            .prepare_run(
                &Config::default(),
                |_| None,
                "Roman Empire\n".as_bytes(),
                &mut prompt,
            )
            .unwrap_err();

        assert!(prompt.is_empty(), "topic must not be requested without credentials");
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::MissingCredentials(missing)) if missing.len() == 3
        ));
    }

    #[test]
    fn test_prepare_run_prompts_once_credentials_resolve() {
        let args = Args::try_parse_from(["history-buff"]).unwrap();
        let mut prompt = Vec::new();

        let (config, topic) = args
            .prepare_run(
                &Config::default(),
                |name| Some(format!("{}-value", name)),
                "Roman Empire\n".as_bytes(),
                &mut prompt,
            )
            .unwrap();

        assert_eq!(topic, "Roman Empire");
        assert_eq!(config.search.api_key, "SERPER_API_KEY-value");
        assert!(!prompt.is_empty());
    }
}
