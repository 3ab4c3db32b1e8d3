//! The finalised launch parameters and their rendering as an argument list.

use crate::utils::TextUtils;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchPlan {
    pub model: String,
    pub alias: String,
    pub ctx_size: i64,
    pub n_predict: i64,
    pub gpu_layers: u32,
    pub batch_size: u32,
    pub ubatch_size: u32,
    pub port: u16,
    pub parallel_slots: u32,
    pub flash_attn: bool,
    pub jinja: bool,
}

impl LaunchPlan {
    /// Server arguments, without the program name, in the server's documented order.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-m".to_string(),
            self.model.clone(),
            "--alias".to_string(),
            self.alias.clone(),
            "-c".to_string(),
            self.ctx_size.to_string(),
            "-n".to_string(),
            self.n_predict.to_string(),
            "-ngl".to_string(),
            self.gpu_layers.to_string(),
            "-b".to_string(),
            self.batch_size.to_string(),
            "-ub".to_string(),
            self.ubatch_size.to_string(),
            "--port".to_string(),
            self.port.to_string(),
            "-np".to_string(),
            self.parallel_slots.to_string(),
        ];
        if self.flash_attn {
            args.push("-fa".to_string());
        }
        if self.jinja {
            args.push("--jinja".to_string());
        }
        args
    }

    /// Copy-pasteable command line for display.
    pub fn command_line(&self, binary: &str) -> String {
        std::iter::once(binary.to_string())
            .chain(self.args())
            .map(|a| TextUtils::shell_quote(&a).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
