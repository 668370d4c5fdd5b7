//! 符号命令解析
//!
//! 外部接口以短文本发送高层意图，本模块将其转换为类型化的 `CommandToken`。

use std::fmt;

/// 符号命令
///
/// | 文本 | 含义 |
/// |------|------|
/// | `a` | 激活 |
/// | `r` | 复位（取消激活） |
/// | `o` | 张开（position = 0） |
/// | `c` | 闭合（position = 255） |
/// | `f` / `l` | 速度 +25 / -25 |
/// | `i` / `d` | 力 +25 / -25 |
/// | 非负整数 | 直接设置位置 |
///
/// 无法识别的文本解析为 `Unknown`，编码时不修改状态，仅重新输出当前命令。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandToken {
    Activate,
    Reset,
    Open,
    Close,
    IncreaseSpeed,
    DecreaseSpeed,
    IncreaseForce,
    DecreaseForce,
    /// 目标位置（未限幅的原始值，超出 `u32` 时饱和）
    Position(u32),
    /// 无法识别的命令（保留原文，便于日志）
    Unknown(String),
}

impl CommandToken {
    /// 解析文本命令
    ///
    /// 前后空白会被忽略；空字符串视为 `Unknown`。
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        match text {
            "a" => Self::Activate,
            "r" => Self::Reset,
            "o" => Self::Open,
            "c" => Self::Close,
            "f" => Self::IncreaseSpeed,
            "l" => Self::DecreaseSpeed,
            "i" => Self::IncreaseForce,
            "d" => Self::DecreaseForce,
            _ if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) => {
                // 全数字但溢出 u32：饱和到最大值，随后限幅到 255
                Self::Position(text.parse::<u32>().unwrap_or(u32::MAX))
            },
            _ => Self::Unknown(text.to_string()),
        }
    }

    /// 是否为可识别命令
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<&str> for CommandToken {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl fmt::Display for CommandToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activate => write!(f, "a"),
            Self::Reset => write!(f, "r"),
            Self::Open => write!(f, "o"),
            Self::Close => write!(f, "c"),
            Self::IncreaseSpeed => write!(f, "f"),
            Self::DecreaseSpeed => write!(f, "l"),
            Self::IncreaseForce => write!(f, "i"),
            Self::DecreaseForce => write!(f, "d"),
            Self::Position(p) => write!(f, "{}", p),
            Self::Unknown(text) => write!(f, "{}", text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_letters() {
        assert_eq!(CommandToken::parse("a"), CommandToken::Activate);
        assert_eq!(CommandToken::parse("r"), CommandToken::Reset);
        assert_eq!(CommandToken::parse("o"), CommandToken::Open);
        assert_eq!(CommandToken::parse("c"), CommandToken::Close);
        assert_eq!(CommandToken::parse("f"), CommandToken::IncreaseSpeed);
        assert_eq!(CommandToken::parse("l"), CommandToken::DecreaseSpeed);
        assert_eq!(CommandToken::parse("i"), CommandToken::IncreaseForce);
        assert_eq!(CommandToken::parse("d"), CommandToken::DecreaseForce);
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(CommandToken::parse("0"), CommandToken::Position(0));
        assert_eq!(CommandToken::parse("128"), CommandToken::Position(128));
        assert_eq!(CommandToken::parse("300"), CommandToken::Position(300));
    }

    #[test]
    fn test_parse_numeric_overflow_saturates() {
        assert_eq!(
            CommandToken::parse("99999999999999999999"),
            CommandToken::Position(u32::MAX)
        );
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(CommandToken::parse(" c\n"), CommandToken::Close);
        assert_eq!(CommandToken::parse("42\r\n"), CommandToken::Position(42));
    }

    #[test]
    fn test_parse_unknown() {
        // 负数不是非负整数
        assert_eq!(
            CommandToken::parse("-5"),
            CommandToken::Unknown("-5".to_string())
        );
        assert_eq!(CommandToken::parse("A"), CommandToken::Unknown("A".to_string()));
        assert_eq!(CommandToken::parse(""), CommandToken::Unknown(String::new()));
        assert!(!CommandToken::parse("open").is_known());
    }

    #[test]
    fn test_display_round_trips_known_tokens() {
        for text in ["a", "r", "o", "c", "f", "l", "i", "d", "17"] {
            assert_eq!(CommandToken::parse(text).to_string(), text);
        }
    }
}
