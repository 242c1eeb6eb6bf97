mod helpers;
pub mod script;
pub mod story;

pub use script::{RhaiScriptEngine, ScriptEngine};
pub use story::{
    EffectOutcome, OptionResult, OptionView, ScriptContext, Section, SectionOption, Story,
    StoryOptions,
};
