//! 睡前故事请求与提示词构建
//!
//! 纯函数，无 I/O：相同输入总是生成逐字节相同的 system instruction。

use serde::{Deserialize, Serialize};

pub const DEFAULT_ANIMAL_NAME: &str = "Whisper";
pub const DEFAULT_MORAL: &str = "kindness";
pub const DEFAULT_SETTING: &str = "enchanted forest";
pub const DEFAULT_REPEATING_PHRASE: &str = "and the stars twinkled overhead";

/// POST /transcript 请求体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoryRequest {
    #[serde(default)]
    pub animal: Option<String>,
    #[serde(default)]
    pub animal_name: Option<String>,
    #[serde(default)]
    pub moral: Option<String>,
    #[serde(default)]
    pub setting: Option<String>,
    #[serde(default)]
    pub repeating_phrase: Option<String>,
}

/// 缺失或空字符串都视为未提供
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl StoryRequest {
    /// 主角动物；缺失或为空时返回 `None`
    pub fn animal(&self) -> Option<&str> {
        non_empty(&self.animal)
    }

    pub fn animal_name(&self) -> &str {
        non_empty(&self.animal_name).unwrap_or(DEFAULT_ANIMAL_NAME)
    }

    pub fn moral(&self) -> &str {
        non_empty(&self.moral).unwrap_or(DEFAULT_MORAL)
    }

    pub fn setting(&self) -> &str {
        non_empty(&self.setting).unwrap_or(DEFAULT_SETTING)
    }

    pub fn repeating_phrase(&self) -> &str {
        non_empty(&self.repeating_phrase).unwrap_or(DEFAULT_REPEATING_PHRASE)
    }
}

/// 根据请求字段生成 system instruction
///
/// 可选字段缺失时代入默认值，不会失败。
pub fn build_system_instruction(request: &StoryRequest) -> String {
    format!(
        "You are a children's storyteller specializing in magical bedtime stories that gently guide children toward sleep. \
         Create a soothing, imaginative tale featuring a {animal} protagonist named {name}.\n\
         \n\
         Story Guidelines:\n\
         - Tone: Gentle, whimsical, and heartwarming with a calming progression\n\
         - Structure: Begin with an awakening/curious moment, include a small challenge, then resolve with comfort and peace\n\
         - Moral: Weave in a subtle lesson about {moral}\n\
         - Length: 350-400 words (approximately 60 seconds when read aloud)\n\
         - Language: Use simple vocabulary with occasional lyrical phrases\n\
         - Setting: Create a vivid {setting} with rich sensory details\n\
         - Pattern: Include a gentle repeating phrase like '{phrase}' that appears 3 times\n\
         - Ending: Gradually wind down with sleepy imagery and a sense of peaceful resolution\n\
         \n\
         Format your response as continuous narrative text suitable for reading aloud. \
         Do not include scene headings, sound effects, narrator instructions, or structural notes.",
        animal = request.animal().unwrap_or("animal"),
        name = request.animal_name(),
        moral = request.moral(),
        setting = request.setting(),
        phrase = request.repeating_phrase(),
    )
}
