//! 命令行参数

use std::path::PathBuf;

use clap::Parser;

/// LLM 驱动的网页自动化：给出目标，智能体操作浏览器直至完成
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// 配置文件路径（覆盖 config/default.toml）
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// 写入任务说明文件的自定义说明
    #[arg(long, value_name = "TEXT")]
    pub instructions: Option<String>,

    /// 自然语言目标
    #[arg(required = true, num_args = 1..)]
    pub objective: Vec<String>,
}

impl Args {
    /// 目标各词以空格拼接
    pub fn objective(&self) -> String {
        self.objective.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_objective_words_joined() {
        let args = Args::try_parse_from(["webpilot", "open", "example.com"]).unwrap();
        assert_eq!(args.objective(), "open example.com");
        assert!(args.config.is_none());
        assert!(args.instructions.is_none());
    }

    #[test]
    fn test_flag_with_equals_is_not_part_of_objective() {
        let args = Args::try_parse_from([
            "webpilot",
            "--config=prod.toml",
            "--instructions",
            "use the mobile site",
            "find",
            "x",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("prod.toml")));
        assert_eq!(args.instructions.as_deref(), Some("use the mobile site"));
        assert_eq!(args.objective(), "find x");
    }

    #[test]
    fn test_help_and_missing_objective_are_errors() {
        let help = Args::try_parse_from(["webpilot", "--help"]).unwrap_err();
        assert_eq!(help.kind(), clap::error::ErrorKind::DisplayHelp);

        let missing = Args::try_parse_from(["webpilot", "--config", "a.toml"]).unwrap_err();
        assert_eq!(missing.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
