use std::{fmt, io::Write};

use serde::{Deserialize, Serialize};
use tabled::{
    builder::Builder,
    settings::{Modify, Padding, Style, object::Segment},
};

use crate::{catalog::ResourceDescriptor, error::Error, filter::FilteredEntry};

/// The output encoding selected for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    Table,
    Wide,
    Name,
    Json,
    Yaml,
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RenderFormat::Table => "",
            RenderFormat::Wide => "wide",
            RenderFormat::Name => "name",
            RenderFormat::Json => "json",
            RenderFormat::Yaml => "yaml",
        })
    }
}

/// Renders the final, sorted entries.
pub trait ResourcePrinter {
    fn render_format(&self) -> RenderFormat;

    fn print(&self, entries: &[FilteredEntry], out: &mut dyn Write) -> Result<(), Error>;
}

/// A family of printers sharing one set of output formats.
pub trait PrintFlags {
    /// Output format strings this family understands.
    fn allowed_formats(&self) -> &'static [&'static str];

    /// Returns a printer when `format` belongs to this family.
    fn to_printer(&self, format: &str) -> Option<Box<dyn ResourcePrinter>>;
}

/// `json` and `yaml`.
#[derive(Debug, Default)]
pub struct JsonYamlPrintFlags;

impl PrintFlags for JsonYamlPrintFlags {
    fn allowed_formats(&self) -> &'static [&'static str] {
        &["json", "yaml"]
    }

    fn to_printer(&self, format: &str) -> Option<Box<dyn ResourcePrinter>> {
        match format {
            "json" => Some(Box::new(StructuredPrinter {
                format: RenderFormat::Json,
            })),
            "yaml" => Some(Box::new(StructuredPrinter {
                format: RenderFormat::Yaml,
            })),
            _ => None,
        }
    }
}

/// The default table and `wide`.
#[derive(Debug, Default)]
pub struct HumanReadablePrintFlags {
    pub no_headers: bool,
}

impl PrintFlags for HumanReadablePrintFlags {
    fn allowed_formats(&self) -> &'static [&'static str] {
        &["wide"]
    }

    fn to_printer(&self, format: &str) -> Option<Box<dyn ResourcePrinter>> {
        let wide = match format {
            "" => false,
            "wide" => true,
            _ => return None,
        };
        Some(Box::new(TablePrinter {
            wide,
            no_headers: self.no_headers,
        }))
    }
}

/// `name`.
#[derive(Debug, Default)]
pub struct NamePrintFlags;

impl PrintFlags for NamePrintFlags {
    fn allowed_formats(&self) -> &'static [&'static str] {
        &["name"]
    }

    fn to_printer(&self, format: &str) -> Option<Box<dyn ResourcePrinter>> {
        (format == "name").then(|| Box::new(NamePrinter) as Box<dyn ResourcePrinter>)
    }
}

/// Output settings as given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputOptions {
    /// Empty for the default table.
    pub format: String,
    pub no_headers: bool,
}

impl OutputOptions {
    fn flags(&self) -> [Box<dyn PrintFlags>; 3] {
        [
            Box::new(JsonYamlPrintFlags),
            Box::new(HumanReadablePrintFlags {
                no_headers: self.no_headers,
            }),
            Box::new(NamePrintFlags),
        ]
    }

    /// Every accepted output format, in negotiation order.
    pub fn allowed_formats(&self) -> Vec<&'static str> {
        let [structured, human, name] = self.flags();
        structured
            .allowed_formats()
            .iter()
            .chain(name.allowed_formats())
            .chain(human.allowed_formats())
            .copied()
            .collect()
    }

    /// Picks the first printer family that accepts the format: structured,
    /// then human-readable, then name.
    pub fn to_printer(&self) -> Result<Box<dyn ResourcePrinter>, Error> {
        self.flags()
            .iter()
            .find_map(|flags| flags.to_printer(&self.format))
            .ok_or_else(|| Error::NoCompatiblePrinter {
                format: self.format.clone(),
                allowed: self.allowed_formats(),
            })
    }
}

/// The list object written by the structured printers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceList {
    pub api_version: String,
    pub kind: String,
    pub resources: Vec<ResourceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    pub group_version: String,
    #[serde(flatten)]
    pub resource: ResourceDescriptor,
}

impl ResourceList {
    pub fn new(entries: &[FilteredEntry]) -> Self {
        ResourceList {
            api_version: "v1".to_string(),
            kind: "APIResourceList".to_string(),
            resources: entries
                .iter()
                .map(|entry| ResourceRecord {
                    group_version: entry.group_version.clone(),
                    resource: entry.resource.clone(),
                })
                .collect(),
        }
    }
}

struct StructuredPrinter {
    format: RenderFormat,
}

impl ResourcePrinter for StructuredPrinter {
    fn render_format(&self) -> RenderFormat {
        self.format
    }

    fn print(&self, entries: &[FilteredEntry], out: &mut dyn Write) -> Result<(), Error> {
        let list = ResourceList::new(entries);
        match self.format {
            RenderFormat::Yaml => serde_yaml::to_writer(&mut *out, &list)?,
            _ => {
                serde_json::to_writer_pretty(&mut *out, &list)?;
                writeln!(out)?;
            }
        }
        Ok(())
    }
}

struct TablePrinter {
    wide: bool,
    no_headers: bool,
}

impl TablePrinter {
    fn headers(&self) -> Vec<String> {
        let mut columns = vec!["NAME", "SHORTNAMES", "APIVERSION", "NAMESPACED", "KIND"];
        if self.wide {
            columns.extend(["VERBS", "CATEGORIES"]);
        }
        columns.into_iter().map(String::from).collect()
    }

    fn row(&self, entry: &FilteredEntry) -> Vec<String> {
        let resource = &entry.resource;
        let mut row = vec![
            resource.name.clone(),
            resource.short_names.join(","),
            entry.group_version.clone(),
            resource.namespaced.to_string(),
            resource.kind.clone(),
        ];
        if self.wide {
            row.push(resource.verbs.join(","));
            row.push(resource.categories.join(","));
        }
        row
    }
}

impl ResourcePrinter for TablePrinter {
    fn render_format(&self) -> RenderFormat {
        if self.wide {
            RenderFormat::Wide
        } else {
            RenderFormat::Table
        }
    }

    fn print(&self, entries: &[FilteredEntry], out: &mut dyn Write) -> Result<(), Error> {
        if self.no_headers && entries.is_empty() {
            return Ok(());
        }

        let mut builder = Builder::default();
        if !self.no_headers {
            builder.push_record(self.headers());
        }
        for entry in entries {
            builder.push_record(self.row(entry));
        }

        let mut table = builder.build();
        table
            .with(Style::empty())
            .with(Modify::new(Segment::all()).with(Padding::new(0, 3, 0, 0)));
        for line in table.to_string().lines() {
            writeln!(out, "{}", line.trim_end())?;
        }
        Ok(())
    }
}

struct NamePrinter;

impl ResourcePrinter for NamePrinter {
    fn render_format(&self) -> RenderFormat {
        RenderFormat::Name
    }

    fn print(&self, entries: &[FilteredEntry], out: &mut dyn Write) -> Result<(), Error> {
        for entry in entries {
            writeln!(out, "{}", entry.qualified_name())?;
        }
        Ok(())
    }
}
