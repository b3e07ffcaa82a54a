use std::str::FromStr;

use crate::error::GradebookError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconName {
    Article,
    BusinessCenter,
    Dashboard,
    Domain,
    Group,
    Help,
    LibraryBooks,
    LocationCity,
    Person,
    VerifiedUser,
    Widgets,
    Work,
    InsertChart,
}

const ALL: [IconName; 13] = [
    IconName::Article,
    IconName::BusinessCenter,
    IconName::Dashboard,
    IconName::Domain,
    IconName::Group,
    IconName::Help,
    IconName::LibraryBooks,
    IconName::LocationCity,
    IconName::Person,
    IconName::VerifiedUser,
    IconName::Widgets,
    IconName::Work,
    IconName::InsertChart,
];

macro_rules! svg {
    ($body:literal) => {
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" height="48" width="48" viewBox="0 -960 960 960">"#,
            $body,
            "</svg>"
        )
    };
}

impl IconName {
    pub fn all() -> &'static [IconName] {
        &ALL
    }

    pub fn name(self) -> &'static str {
        match self {
            IconName::Article => "article",
            IconName::BusinessCenter => "business_center",
            IconName::Dashboard => "dashboard",
            IconName::Domain => "domain",
            IconName::Group => "group",
            IconName::Help => "help",
            IconName::LibraryBooks => "library_books",
            IconName::LocationCity => "location_city",
            IconName::Person => "person",
            IconName::VerifiedUser => "verified_user",
            IconName::Widgets => "widgets",
            IconName::Work => "work",
            IconName::InsertChart => "insert_chart",
        }
    }

    pub fn markup(self) -> &'static str {
        match self {
            IconName::Article => svg!(
                r#"<path d="M200-120q-33 0-56.5-23.5T120-200v-560q0-33 23.5-56.5T200-840h560q33 0 56.5 23.5T840-760v560q0 33-23.5 56.5T760-120H200Zm80-160h280v-80H280v80Zm0-160h400v-80H280v80Zm0-160h400v-80H280v80Z"/>"#
            ),
            IconName::BusinessCenter => svg!(
                r#"<path d="M160-120q-33 0-56.5-23.5T80-200v-160h320v80h160v-80h320v160q0 33-23.5 56.5T800-120H160Zm280-240v-80h80v80h-80ZM80-440v-200q0-33 23.5-56.5T160-720h160v-80q0-33 23.5-56.5T400-880h160q33 0 56.5 23.5T640-800v80h160q33 0 56.5 23.5T880-640v200H560v-80H400v80H80Zm320-280h160v-80H400v80Z"/>"#
            ),
            IconName::Dashboard => svg!(
                r#"<path d="M520-600v-240h320v240H520ZM120-440v-400h320v400H120Zm400 320v-400h320v400H520Zm-400 0v-240h320v240H120Z"/>"#
            ),
            IconName::Domain => svg!(
                r#"<path d="M80-120v-720h400v160h400v560H80Zm80-80h80v-80h-80v80Zm0-160h80v-80h-80v80Zm0-160h80v-80h-80v80Zm0-160h80v-80h-80v80Zm160 480h80v-80h-80v80Zm0-160h80v-80h-80v80Zm0-160h80v-80h-80v80Zm0-160h80v-80h-80v80Zm160 480h320v-400H480v80h80v80h-80v80h80v80h-80v80Zm160-240v-80h80v80h-80Zm0 160v-80h80v80h-80Z"/>"#
            ),
            IconName::Group => svg!(
                r#"<path d="M40-160v-112q0-34 17.5-62.5T104-378q62-31 126-46.5T360-440q66 0 130 15.5T616-378q29 15 46.5 43.5T680-272v112H40Zm720 0v-120q0-44-24.5-84.5T666-434q51 6 96 20.5t84 35.5q36 20 55 44.5t19 53.5v120H760ZM360-480q-66 0-113-47t-47-113q0-66 47-113t113-47q66 0 113 47t47 113q0 66-47 113t-113 47Zm400-160q0 66-47 113t-113 47q-11 0-28-2.5t-28-5.5q27-32 41.5-71t14.5-81q0-42-14.5-81T544-792q14-5 28-6.5t28-1.5q66 0 113 47t47 113Z"/>"#
            ),
            IconName::Help => svg!(
                r#"<path d="M478-240q21 0 35.5-14.5T528-290q0-21-14.5-35.5T478-340q-21 0-35.5 14.5T428-290q0 21 14.5 35.5T478-240Zm-36-154h74q0-33 7.5-52t42.5-52q26-26 41-49.5t15-56.5q0-56-41-86t-97-30q-57 0-92.5 30T342-618l66 26q5-18 22.5-39t53.5-21q32 0 48 17.5t16 38.5q0 20-12 37.5T506-526q-44 39-54 59t-10 73Zm38 314q-83 0-156-31.5T197-197q-54-54-85.5-127T80-480q0-83 31.5-156T197-763q54-54 127-85.5T480-880q83 0 156 31.5T763-763q54 54 85.5 127T880-480q0 83-31.5 156T763-197q-54 54-127 85.5T480-80Z"/>"#
            ),
            IconName::LibraryBooks => svg!(
                r#"<path d="M400-400h160v-80H400v80Zm0-120h320v-80H400v80Zm0-120h320v-80H400v80Zm-80 400q-33 0-56.5-23.5T240-320v-480q0-33 23.5-56.5T320-880h480q33 0 56.5 23.5T880-800v480q0 33-23.5 56.5T800-240H320ZM160-80q-33 0-56.5-23.5T80-160v-560h80v560h560v80H160Z"/>"#
            ),
            IconName::LocationCity => svg!(
                r#"<path d="M120-120v-560h240v-80l120-120 120 120v240h240v400H120Zm80-80h80v-80h-80v80Zm0-160h80v-80h-80v80Zm0-160h80v-80h-80v80Zm240 320h80v-80h-80v80Zm0-160h80v-80h-80v80Zm0-160h80v-80h-80v80Zm0-160h80v-80h-80v80Zm240 480h80v-80h-80v80Zm0-160h80v-80h-80v80Z"/>"#
            ),
            IconName::Person => svg!(
                r#"<path d="M480-480q-66 0-113-47t-47-113q0-66 47-113t113-47q66 0 113 47t47 113q0 66-47 113t-113 47ZM160-160v-112q0-34 17.5-62.5T224-378q62-31 126-46.5T480-440q66 0 130 15.5T736-378q29 15 46.5 43.5T800-272v112H160Z"/>"#
            ),
            IconName::VerifiedUser => svg!(
                r#"<path d="m438-338 226-226-57-57-169 169-84-84-57 57 141 141Zm42 258q-139-35-229.5-159.5T160-516v-244l320-120 320 120v244q0 152-90.5 276.5T480-80Z"/>"#
            ),
            IconName::Widgets => svg!(
                r#"<path d="M666-440 440-666l226-226 226 226-226 226Zm-546-80v-320h320v320H120Zm400 400v-320h320v320H520Zm-400 0v-320h320v320H120Z"/>"#
            ),
            IconName::Work => svg!(
                r#"<path d="M160-120q-33 0-56.5-23.5T80-200v-440q0-33 23.5-56.5T160-720h160v-80q0-33 23.5-56.5T400-880h160q33 0 56.5 23.5T640-800v80h160q33 0 56.5 23.5T880-640v440q0 33-23.5 56.5T800-120H160Zm240-600h160v-80H400v80Z"/>"#
            ),
            IconName::InsertChart => svg!(
                r#"<path d="M280-280h80v-280h-80v280Zm160 0h80v-400h-80v400Zm160 0h80v-160h-80v160ZM200-120q-33 0-56.5-23.5T120-200v-560q0-33 23.5-56.5T200-840h560q33 0 56.5 23.5T840-760v560q0 33-23.5 56.5T760-120H200Z"/>"#
            ),
        }
    }
}

impl FromStr for IconName {
    type Err = GradebookError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        ALL.iter()
            .copied()
            .find(|icon| icon.name() == name)
            .ok_or_else(|| GradebookError::UnknownIcon(name.to_string()))
    }
}
