use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Node of the WHO Anatomical Therapeutic Chemical classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AtxCategory {
    pub code: String,
    pub level: i64,
    pub name: String,
    pub name_ru: Option<String>,
    pub name_uz: Option<String>,
    pub parent_code: Option<String>,
}

impl AtxCategory {
    fn builtin(
        code: &str,
        level: i64,
        name: &str,
        name_ru: &str,
        name_uz: Option<&str>,
        parent_code: Option<&str>,
    ) -> Self {
        Self {
            code: code.to_string(),
            level,
            name: name.to_string(),
            name_ru: Some(name_ru.to_string()),
            name_uz: name_uz.map(str::to_string),
            parent_code: parent_code.map(str::to_string),
        }
    }
}

#[rustfmt::skip]
const LEVEL_ONE: &[(&str, &str, &str, &str)] = &[
    ("A", "Alimentary tract and metabolism", "Пищеварительный тракт и обмен веществ", "Ovqat hazm qilish va moddalar almashinuvi"),
    ("B", "Blood and blood forming organs", "Кровь и кроветворные органы", "Qon va qon hosil qiluvchi organlar"),
    ("C", "Cardiovascular system", "Сердечно-сосудистая система", "Yurak-qon tomir tizimi"),
    ("D", "Dermatologicals", "Дерматологические препараты", "Dermatologik preparatlar"),
    ("G", "Genito-urinary system and sex hormones", "Мочеполовая система и половые гормоны", "Siydik-tanosil tizimi va jinsiy gormonlar"),
    ("H", "Systemic hormonal preparations", "Системные гормональные препараты", "Tizimli gormonal preparatlar"),
    ("J", "Antiinfectives for systemic use", "Противомикробные препараты для системного применения", "Tizimli antimikrob preparatlar"),
    ("L", "Antineoplastic and immunomodulating agents", "Противоопухолевые и иммуномодулирующие препараты", "O'simtalarga qarshi va immunomodulyator preparatlar"),
    ("M", "Musculo-skeletal system", "Костно-мышечная система", "Suyak-mushak tizimi"),
    ("N", "Nervous system", "Нервная система", "Nerv tizimi"),
    ("P", "Antiparasitic products, insecticides", "Противопаразитарные препараты", "Parazitlarga qarshi preparatlar"),
    ("R", "Respiratory system", "Дыхательная система", "Nafas olish tizimi"),
    ("S", "Sensory organs", "Органы чувств", "Sezgi organlari"),
    ("V", "Various", "Прочие", "Boshqalar"),
];

#[rustfmt::skip]
const LEVEL_TWO: &[(&str, &str, &str)] = &[
    ("A01", "Stomatological preparations", "Стоматологические препараты"),
    ("A02", "Drugs for acid related disorders", "Препараты для лечения кислотозависимых заболеваний"),
    ("A03", "Drugs for functional gastrointestinal disorders", "Препараты для функциональных нарушений ЖКТ"),
    ("A04", "Antiemetics and antinauseants", "Противорвотные препараты"),
    ("A05", "Bile and liver therapy", "Препараты для печени и желчевыводящих путей"),
    ("A06", "Drugs for constipation", "Слабительные"),
    ("A07", "Antidiarrheals", "Противодиарейные препараты"),
    ("A10", "Drugs used in diabetes", "Противодиабетические препараты"),
    ("A11", "Vitamins", "Витамины"),
    ("A12", "Mineral supplements", "Минеральные добавки"),
    ("C01", "Cardiac therapy", "Препараты для лечения заболеваний сердца"),
    ("C02", "Antihypertensives", "Антигипертензивные препараты"),
    ("C03", "Diuretics", "Диуретики"),
    ("C05", "Vasoprotectives", "Вазопротекторы"),
    ("C07", "Beta blocking agents", "Бета-адреноблокаторы"),
    ("C08", "Calcium channel blockers", "Блокаторы кальциевых каналов"),
    ("C09", "Agents acting on the renin-angiotensin system", "Препараты, влияющие на РААС"),
    ("C10", "Lipid modifying agents", "Гиполипидемические препараты"),
    ("J01", "Antibacterials for systemic use", "Антибактериальные препараты"),
    ("J02", "Antimycotics for systemic use", "Противогрибковые препараты"),
    ("J04", "Antimycobacterials", "Противотуберкулёзные препараты"),
    ("J05", "Antivirals for systemic use", "Противовирусные препараты"),
    ("J06", "Immune sera and immunoglobulins", "Иммуноглобулины"),
    ("J07", "Vaccines", "Вакцины"),
    ("N01", "Anesthetics", "Анестетики"),
    ("N02", "Analgesics", "Анальгетики"),
    ("N03", "Antiepileptics", "Противоэпилептические препараты"),
    ("N04", "Anti-parkinson drugs", "Противопаркинсонические препараты"),
    ("N05", "Psycholeptics", "Психолептики"),
    ("N06", "Psychoanaleptics", "Психоаналептики"),
    ("N07", "Other nervous system drugs", "Другие препараты для нервной системы"),
];

/// Built-in classification used when no categories are stored.
///
/// Level 1 lists the anatomical main groups. Level 2 is only known for a few
/// common groups and requires `parent`; anything else yields level 1.
pub fn standard_atx(level: i64, parent: Option<&str>) -> Vec<AtxCategory> {
    match (level, parent) {
        (2, Some(parent)) => {
            let parent = parent.trim().to_uppercase();
            LEVEL_TWO
                .iter()
                .filter(|(code, _, _)| code.starts_with(parent.as_str()))
                .map(|(code, name, name_ru)| {
                    AtxCategory::builtin(code, 2, name, name_ru, None, Some(&parent))
                })
                .collect()
        }
        _ => LEVEL_ONE
            .iter()
            .map(|(code, name, name_ru, name_uz)| {
                AtxCategory::builtin(code, 1, name, name_ru, Some(name_uz), None)
            })
            .collect(),
    }
}
