//! Templates for the generated module files

use minijinja::{AutoEscape, Environment};

use super::declarations::python_string;

pub const MANIFEST_TEMPLATE: &str = r"# -*- coding: utf-8 -*-
{
    'name': {{ title | py }},
    'version': {{ version | py }},
    'summary': 'Replaces Studio customizations with module-defined fields',
    'category': 'Technical',
    'depends': [{% for dep in depends %}{{ dep | py }}{% if not loop.last %}, {% endif %}{% endfor %}],
    'data': [
{% for file in data %}
        {{ file | py }},
{% endfor %}
    ],
    'installable': True,
    'auto_install': False,
    'application': False,
    'license': 'LGPL-3',
}
";

pub const MODULE_INIT: &str = "# -*- coding: utf-8 -*-\nfrom . import models\n";

pub const MODELS_INIT_TEMPLATE: &str = r"# -*- coding: utf-8 -*-
{% for stem in stems %}
from . import {{ stem }}
{% endfor %}
";

pub const MODEL_TEMPLATE: &str = r"# -*- coding: utf-8 -*-
from odoo import fields, models


class {{ class_name }}(models.Model):
    _inherit = {{ model | py }}

{% for field in fields %}
    {{ field.name }} = {{ field.constructor }}
{% endfor %}
";

pub const VIEWS_TEMPLATE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<odoo>
    <data>
{% for view in views %}
        <record id="{{ view.record_id }}" model="ir.ui.view">
            <field name="name">{{ view.name | xml }}</field>
            <field name="model">{{ view.model | xml }}</field>
            <field name="inherit_id" ref="{{ view.base_view | xml }}"/>
            <field name="priority">{{ view.priority }}</field>
            <field name="arch" type="xml">
                {{ view.arch }}
            </field>
        </record>
{% endfor %}
    </data>
</odoo>
"#;

pub const REPORTS_TEMPLATE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<odoo>
    <data>
        <!-- Studio reports preserved for manual recreation -->
{% for report in reports %}

        <!-- Report: {{ report.name | comment }} -->
        <!-- Original report_name: {{ report.report_name | comment }} -->
        <!-- Model: {{ report.model | comment }} -->
        <!-- Type: {{ report.report_type | comment }} -->
        <!-- Flagged by: {{ report.signals | join(', ') }} -->
{% endfor %}
    </data>
</odoo>
"#;

/// Environment with the filters the templates use and no auto-escaping
pub fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.set_trim_blocks(true);
    env.set_keep_trailing_newline(true);
    env.add_filter("py", |value: String| python_string(&value));
    env.add_filter("xml", xml_text);
    env.add_filter("comment", xml_comment);
    env
}

/// Text safe inside `<!-- ... -->`; one pass over `---` would leave a `--`
fn xml_comment(value: String) -> String {
    let mut text = value;
    while text.contains("--") {
        text = text.replace("--", "- -");
    }
    text
}

fn xml_text(value: String) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
