use serde::{ Deserialize, Serialize };
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
    Ta,
    Te,
    Bn,
    Mr,
    Gu,
    Kn,
    Ml,
    Pa,
}

pub const ALL_LANGUAGES: [Language; 10] = [
    Language::En,
    Language::Hi,
    Language::Ta,
    Language::Te,
    Language::Bn,
    Language::Mr,
    Language::Gu,
    Language::Kn,
    Language::Ml,
    Language::Pa,
];

#[derive(Debug, PartialEq, Eq)]
pub struct ParseLanguageError {
    message: String,
}

impl fmt::Display for ParseLanguageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseLanguageError {}

impl FromStr for Language {
    type Err = ParseLanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Language::En),
            "hi" => Ok(Language::Hi),
            "ta" => Ok(Language::Ta),
            "te" => Ok(Language::Te),
            "bn" => Ok(Language::Bn),
            "mr" => Ok(Language::Mr),
            "gu" => Ok(Language::Gu),
            "kn" => Ok(Language::Kn),
            "ml" => Ok(Language::Ml),
            "pa" => Ok(Language::Pa),
            _ =>
                Err(ParseLanguageError {
                    message: format!("Unsupported language code: '{}'", s),
                }),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Language {
    /// Parses a stored or user supplied code, falling back to English for
    /// anything outside the supported set.
    pub fn from_code_or_default(code: Option<&str>) -> Self {
        code.and_then(|c| c.parse().ok()).unwrap_or_default()
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
            Language::Ta => "ta",
            Language::Te => "te",
            Language::Bn => "bn",
            Language::Mr => "mr",
            Language::Gu => "gu",
            Language::Kn => "kn",
            Language::Ml => "ml",
            Language::Pa => "pa",
        }
    }

    /// Name of the language written in its own script.
    pub fn native_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Hi => "हिंदी",
            Language::Ta => "தமிழ்",
            Language::Te => "తెలుగు",
            Language::Bn => "বাংলা",
            Language::Mr => "मराठी",
            Language::Gu => "ગુજરાતી",
            Language::Kn => "ಕನ್ನಡ",
            Language::Ml => "മലയാളം",
            Language::Pa => "ਪੰਜਾਬੀ",
        }
    }

    /// Disclaimer appended as the assistant turn when the gateway call fails.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Language::Hi =>
                "क्षमा करें, मुझे कानूनी जानकारी प्राप्त करने में समस्या हो रही है। कृपया फिर से कोशिश करें।",
            Language::Ta =>
                "மன்னிக்கவும், சட்டத் தகவலை அணுகுவதில் சிக்கல் உள்ளது. மீண்டும் முயற்சிக்கவும்.",
            _ =>
                "I apologize, but I'm having trouble accessing legal information right now. Please try again or consult with a qualified legal professional for important legal matters.",
        }
    }

    pub fn suggested_questions(&self) -> &'static [&'static str] {
        match self {
            Language::Hi => &SUGGESTED_HI,
            Language::Ta => &SUGGESTED_TA,
            _ => &SUGGESTED_EN,
        }
    }

    pub fn strings(&self) -> UiStrings {
        match self {
            Language::Hi => UiStrings {
                tagline: "अपने भारतीय कानून के सवालों के तुरंत जवाब पाएं",
                powered_by: "भारतीय संविधान, अधिनियम और मामले के कानून के व्यापक ज्ञान के साथ AI द्वारा संचालित",
                chat_title: "कानूनी सहायक चैट",
                welcome_title: "AI कानूनी सहायक में आपका स्वागत है",
                welcome_body: "भारतीय कानून, संविधान या कानूनी प्रक्रियाओं के बारे में मुझसे कुछ भी पूछें",
                loading: "आपके कानूनी प्रश्न का विश्लेषण कर रहे हैं...",
                placeholder: "यहां अपना कानूनी प्रश्न पूछें... (जैसे, हिंदू विवाह अधिनियम के तहत तलाक के आधार क्या हैं?)",
                suggestions_title: "सुझाए गए प्रश्न",
                disclaimer_title: "कानूनी अस्वीकरण",
                disclaimer_body: DISCLAIMER_BODY,
            },
            Language::Ta => UiStrings {
                tagline: "உங்கள் இந்திய சட்ட கேள்விகளுக்கு உடனடி பதில்களைப் பெறுங்கள்",
                powered_by: "இந்திய அரசியலமைப்பு, சட்டங்கள் மற்றும் வழக்கு சட்டங்களின் விரிவான அறிவுடன் AI ஆல் இயக்கப்படுகிறது",
                chat_title: "சட்ட உதவியாளர் அரட்டை",
                welcome_title: "AI சட்ட உதவியாளருக்கு வரவேற்கிறோம்",
                welcome_body: "இந்திய சட்டம், அரசியலமைப்பு அல்லது சட்ட நடைமுறைகள் பற்றி என்னிடம் எதையும் கேளுங்கள்",
                loading: "உங்கள் சட்ட கேள்வியை ஆராய்கிறது...",
                placeholder: "உங்கள் சட்ட கேள்வியை இங்கே கேளுங்கள்... (எ.கா., இந்து திருமண சட்டத்தின் கீழ் விவாகரத்துக்கான அடிப்படைகள் என்ன?)",
                suggestions_title: "பரிந்துரைக்கப்பட்ட கேள்விகள்",
                disclaimer_title: "சட்ட மறுப்பு",
                disclaimer_body: DISCLAIMER_BODY,
            },
            _ => UiStrings {
                tagline: "Get instant answers to your Indian law questions",
                powered_by: "Powered by AI with comprehensive knowledge of Indian Constitution, Acts, and case law",
                chat_title: "Legal Assistant Chat",
                welcome_title: "Welcome to AI Legal Assistant",
                welcome_body: "Ask me anything about Indian law, constitution, or legal procedures",
                loading: "Analyzing your legal query...",
                placeholder: "Ask your legal question here... (e.g., What are the grounds for divorce under Hindu Marriage Act?)",
                suggestions_title: "Suggested Questions",
                disclaimer_title: "Legal Disclaimer",
                disclaimer_body: DISCLAIMER_BODY,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UiStrings {
    pub tagline: &'static str,
    pub powered_by: &'static str,
    pub chat_title: &'static str,
    pub welcome_title: &'static str,
    pub welcome_body: &'static str,
    pub loading: &'static str,
    pub placeholder: &'static str,
    pub suggestions_title: &'static str,
    pub disclaimer_title: &'static str,
    pub disclaimer_body: &'static str,
}

/// Everything a client needs to render the assistant in one language.
#[derive(Debug, Clone, Serialize)]
pub struct LocaleBundle {
    pub code: &'static str,
    pub name: &'static str,
    pub strings: UiStrings,
    pub suggested_questions: &'static [&'static str],
    pub languages: Vec<LanguageOption>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguageOption {
    pub code: &'static str,
    pub name: &'static str,
}

pub fn locale_bundle(language: Language) -> LocaleBundle {
    LocaleBundle {
        code: language.code(),
        name: language.native_name(),
        strings: language.strings(),
        suggested_questions: language.suggested_questions(),
        languages: ALL_LANGUAGES.iter()
            .map(|l| LanguageOption { code: l.code(), name: l.native_name() })
            .collect(),
    }
}

// The disclaimer body is only written in English.
const DISCLAIMER_BODY: &str =
    "This AI assistant provides general legal information for educational purposes only. For specific legal advice, please consult with a qualified legal professional. The information provided should not be considered as legal advice or substitute for professional legal consultation.";

const SUGGESTED_EN: [&str; 6] = [
    "What are the key provisions of Article 21 of the Indian Constitution?",
    "Explain the procedure for filing a PIL in the Supreme Court",
    "What are the recent amendments to the Companies Act 2013?",
    "How does the GST Act 2017 impact small businesses?",
    "What is the significance of the Basic Structure Doctrine?",
    "Explain the Bharatiya Nyaya Sanhita 2023 changes",
];

const SUGGESTED_HI: [&str; 6] = [
    "भारतीय संविधान के अनुच्छेद 21 के मुख्य प्रावधान क्या हैं?",
    "सुप्रीम कोर्ट में PIL दाखिल करने की प्रक्रिया बताएं",
    "कंपनी अधिनियम 2013 में हाल के संशोधन क्या हैं?",
    "GST अधिनियम 2017 छोटे व्यवसायों को कैसे प्रभावित करता है?",
    "मूल संरचना सिद्धांत का क्या महत्व है?",
    "भारतीय न्याय संहिता 2023 के बदलाव समझाएं",
];

const SUGGESTED_TA: [&str; 6] = [
    "இந்திய அரசியலமைப்பின் பிரிவு 21 இன் முக்கிய விதிகள் என்ன?",
    "உச்ச நீதிமன்றத்தில் PIL தாக்கல் செய்வதற்கான செயல்முறையை விளக்கவும்",
    "நிறுவனங்கள் சட்டம் 2013 இல் சமீபத்திய திருத்தங்கள் என்ன?",
    "GST சட்டம் 2017 சிறு வணிகங்களை எவ்வாறு பாதிக்கிறது?",
    "அடிப்படை கட்டமைப்பு கோட்பாட்டின் முக்கியத்துவம் என்ன?",
    "பாரதிய நியாய சமிதா 2023 மாற்றங்களை விளக்கவும்",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_supported_code() {
        for lang in ALL_LANGUAGES {
            assert_eq!(lang.code().parse::<Language>(), Ok(lang));
        }
        assert_eq!("HI".parse::<Language>(), Ok(Language::Hi));
    }

    #[test]
    fn unknown_code_falls_back_to_english() {
        assert!("fr".parse::<Language>().is_err());
        assert_eq!(Language::from_code_or_default(Some("fr")), Language::En);
        assert_eq!(Language::from_code_or_default(None), Language::En);
        assert_eq!(Language::from_code_or_default(Some("ta")), Language::Ta);
    }

    #[test]
    fn serde_uses_lowercase_codes() {
        assert_eq!(serde_json::to_string(&Language::Kn).unwrap(), "\"kn\"");
        let lang: Language = serde_json::from_str("\"ml\"").unwrap();
        assert_eq!(lang, Language::Ml);
    }

    #[test]
    fn failure_messages_are_localised_for_hindi_and_tamil_only() {
        assert_eq!(
            Language::Hi.failure_message(),
            "क्षमा करें, मुझे कानूनी जानकारी प्राप्त करने में समस्या हो रही है। कृपया फिर से कोशिश करें।"
        );
        assert_eq!(
            Language::Ta.failure_message(),
            "மன்னிக்கவும், சட்டத் தகவலை அணுகுவதில் சிக்கல் உள்ளது. மீண்டும் முயற்சிக்கவும்."
        );
        assert_eq!(Language::Bn.failure_message(), Language::En.failure_message());
    }

    #[test]
    fn suggestions_fall_back_to_english() {
        assert_eq!(Language::Gu.suggested_questions(), Language::En.suggested_questions());
        assert_eq!(Language::Hi.suggested_questions().len(), 6);
    }

    #[test]
    fn locale_bundle_lists_all_languages() {
        let bundle = locale_bundle(Language::Te);
        assert_eq!(bundle.code, "te");
        assert_eq!(bundle.name, "తెలుగు");
        assert_eq!(bundle.languages.len(), 10);
        assert_eq!(bundle.strings.chat_title, "Legal Assistant Chat");
    }
}
