//! Enumerated engagement attributes (subject, legal form, supervisory body,
//! audit report type and paragraph).
//!
//! Each list is open-ended: rows written before a code was retired keep their
//! raw value as `Legacy(String)`. New input must use a known code; an update
//! may resubmit the legacy value the row already holds.

use crate::error::FieldViolation;

/// Common behaviour of the generated choice enums.
pub trait Choice: Sized {
    /// Every code currently offered for new input.
    const KNOWN: &'static [&'static str];

    /// Parse a stored code. Unknown codes become the legacy variant.
    fn from_code(code: &str) -> Self;

    /// The code persisted in the database.
    fn code(&self) -> &str;

    /// Human-readable label.
    fn label(&self) -> &str;

    fn is_legacy(&self) -> bool;
}

macro_rules! define_choice_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $variant:ident => ($code:literal, $label:literal) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $variant, )+
            /// A stored code that is no longer in the choice list.
            Legacy(String),
        }

        impl Choice for $name {
            const KNOWN: &'static [&'static str] = &[$($code),+];

            fn from_code(code: &str) -> Self {
                match code {
                    $( $code => Self::$variant, )+
                    other => Self::Legacy(other.to_string()),
                }
            }

            fn code(&self) -> &str {
                match self {
                    $( Self::$variant => $code, )+
                    Self::Legacy(raw) => raw,
                }
            }

            fn label(&self) -> &str {
                match self {
                    $( Self::$variant => $label, )+
                    Self::Legacy(raw) => raw,
                }
            }

            fn is_legacy(&self) -> bool {
                matches!(self, Self::Legacy(_))
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.code())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
                Ok(Self::from_code(&raw))
            }
        }
    };
}

define_choice_enum! {
    /// Subject of the engagement (public-interest "O" vs other "I" entities).
    EngagementSubject {
        PublicAudit => ("O_AUDIT", "Аудит фінансової звітності та/або консолідованої фінансової звітності (О)"),
        PublicReview => ("O_REVIEW", "Огляд історичної фінансової звітності та проміжної фінансової інформації (О)"),
        PublicAssurance => ("O_ASSURANCE", "Завдання з надання впевненості, не є аудитом або оглядом (О)"),
        OtherAudit => ("I_AUDIT", "Аудит фінансової звітності та/або консолідованої фінансової звітності (І)"),
        OtherReview => ("I_REVIEW", "Огляд історичної фінансової звітності та проміжної фінансової інформації (І)"),
        OtherAssurance => ("I_ASSURANCE", "Завдання з надання впевненості, не є аудитом або оглядом (І)"),
        Related => ("RELATED", "Супутні послуги"),
        NonAudit => ("NON_AUDIT", "Інші неаудиторські послуги"),
    }
}

define_choice_enum! {
    /// Organizational and legal form of the audited entity.
    LegalForm {
        Fop => ("FOP", "Фізична особа-підприємець"),
        Llc => ("LLC", "Товариство з обмеженою відповідальністю (ТОВ)"),
        Oao => ("OAO", "Відкрите акціонерне товариство (ВАТ)"),
        Zao => ("ZAO", "Закрите акціонерне товариство (ЗАТ)"),
        Chao => ("CHAO", "Приватне акціонерне товариство (ПрАТ)"),
        Kt => ("KT", "Командитне товариство"),
        Koll => ("KOLL", "Командитне товариство з обмеженою відповідальністю"),
        Partner => ("PARTNER", "Партнерства (господарські товариства)"),
        Coop => ("COOP", "Кооперативи"),
        ForeignBranch => ("FOREIGN_BRANCH", "Філія або представництво іноземної компанії"),
        ForeignInvest => ("FOREIGN_INVEST", "Підприємства з іноземними інвестиціями"),
        IntOrg => ("INT_ORG", "Міжнародні господарські організації"),
        Farm => ("FARM", "Фермерські господарства"),
        StateEnterprise => ("STATE_ENT", "Державні підприємства"),
        Treasury => ("KAZENNOE", "Казенні підприємства"),
        Communal => ("COMMUNAL", "Комунальні підприємства"),
        LlcOther => ("LLC2", "Товариство з обмеженою відповідальністю (інше)"),
        AdditionalLiability => ("ODD", "Товариство з додатковою відповідальністю"),
        Government => ("GOV", "Органи державної влади"),
        GovernmentOrg => ("GOV_ORG", "Державні організації (установи, заклади)"),
        Political => ("POLITICAL", "Політичні партії"),
        Ngo => ("NGO", "Громадські та благодійні організації"),
        Pao => ("PAO", "Публічні акціонерні товариства"),
        Apu => ("APU", "Аудиторська палата України"),
        PrivateEnterprise => ("PRIVATE_ENT", "Приватне підприємство"),
        Subsidiary => ("SUBSIDIARY_ENT", "Дочірнє підприємство"),
        Jsc => ("JSC", "Акціонерне товариство"),
    }
}

define_choice_enum! {
    /// Government body supervising the audited entity.
    SupervisoryBody {
        Agrarian => ("AGRARIAN", "Міністерство аграрної політики та продовольства України"),
        InternalAffairs => ("MIA", "Міністерство внутрішніх справ України"),
        Ecology => ("ECOLOGY", "Міністерство екології та природних ресурсів України"),
        Economy => ("ECONOMY", "Міністерство економічного розвитку і торгівлі України"),
        Energy => ("ENERGY", "Міністерство енергетики та вугільної промисловості України"),
        Infrastructure => ("INFRA", "Міністерство інфраструктури України"),
        Culture => ("CULTURE", "Міністерство культури України"),
        Education => ("EDU", "Міністерство освіти і науки України"),
        Health => ("HEALTH", "Міністерство охорони здоров’я України"),
        Social => ("SOCIAL", "Міністерство соціальної політики України"),
        Finance => ("FINANCE", "Міністерство фінансів України"),
        SpecialCommunications => ("DSSZZI", "Адміністрація Держспецзв’язку України"),
        Nuclear => ("NUCLEAR", "Державна інспекція ядерного регулювання України"),
        Regulatory => ("REG_SERVICE", "Державна регуляторна служба України"),
        FoodSafety => ("FOOD_SAFETY", "Держпродспоживслужба України"),
        Forestry => ("FORESTRY", "Держлісагентство України"),
        Fisheries => ("FISHERIES", "Держрибагентство України"),
        Emergency => ("EMERGENCY", "ДСНС України"),
        EcoInspection => ("ECO_INSPECTION", "Державна екологічна інспекція України"),
        Geology => ("GEOLOGY", "Державна служба геології та надр України"),
        Aviation => ("AVIA", "Державіаслужба України"),
        Transport => ("TRANSPORT", "Укртрансбезпека"),
        Cinema => ("CINEMA", "Держкіно України"),
        EducationQuality => ("EDU_QUALITY", "Державна служба якості освіти України"),
        DrugControl => ("DRUG_CONTROL", "Держлікслужба України"),
        ArchitectureInspection => ("DABI", "ДАБІ України"),
        GeoCadastre => ("GEO_CADASTRE", "Держгеокадастр України"),
        Labor => ("LABOR", "Державна служба з питань праці"),
        Pension => ("PENSION", "Пенсійний фонд України"),
        Tax => ("TAX", "Державна фіскальна служба"),
        FinancialServices => ("NCR_FIN", "Нацкомфінпослуг"),
        EnergyRegulator => ("NCR_EC", "НКРЕКП"),
        Securities => ("NCSM", "НКЦПФР"),
        Security => ("SBU", "Служба безпеки України"),
        EnergySupervision => ("ENERGY_SUPERV", "Інспекція енергетичного нагляду України"),
        Regions => ("MINREGION", "Міністерство розвитку громад та територій України"),
        Maritime => ("SEA_RIVER_TRANSPORT", "Морська адміністрація України"),
        NationalBank => ("NBU", "Національний банк України"),
    }
}

define_choice_enum! {
    /// Kind of modified opinion in the audit report.
    ReportType {
        Qualified => ("QUALIFIED", "Думка із застереженням"),
        Adverse => ("ADVERSE", "Негативна думка"),
        Disclaimer => ("DISCLAIMER", "Відмова від висловлення думки"),
    }
}

define_choice_enum! {
    /// Additional paragraph in the audit report.
    ReportParagraph {
        Other => ("OTHER", "Параграф: Інше"),
        GoingConcern => ("GOING_CONCERN", "Суттєва невизначеність щодо безперервності діяльності"),
    }
}

/// Label for an optional stored code, empty when absent.
pub fn label_for<C: Choice>(code: Option<&str>) -> String {
    match code {
        Some(c) if !c.is_empty() => C::from_code(c).label().to_string(),
        _ => String::new(),
    }
}

/// Check a submitted choice code.
///
/// Empty input passes (presence is checked separately). Unknown codes are
/// rejected unless they equal the value already stored on the row.
pub fn check_choice<C: Choice>(
    field: &str,
    submitted: Option<&str>,
    stored: Option<&str>,
) -> Option<FieldViolation> {
    let code = match submitted {
        Some(c) if !c.trim().is_empty() => c,
        _ => return None,
    };
    if !C::from_code(code).is_legacy() || stored == Some(code) {
        return None;
    }
    Some(FieldViolation::new(
        field,
        format!("Unknown value '{code}'. Must be one of: {}", C::KNOWN.join(", ")),
    ))
}
