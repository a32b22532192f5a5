//! Fixed instructional prompts for the generation service
//!
//! These describe the contract to the model. Enforcement lives in code:
//! the stage allow-list in `translator` and the date window in `filters`.

use crate::models::StageOperator;

/// System context sent with every generation call
pub const SCHEMA_CONTEXT: &str = r#"You know this MongoDB schema.

Collection: sales
Fields:
- productId (string)
- date (date)
- quantity (number)
- revenue (number)
- profit (number)

Collection: products
Fields:
- _id (string)
- name (string)
- category (string)
- price (number)
- profitMargin (number)

Join rule:
sales.productId == products._id

Each sales document represents one transaction on one date.

Revenue and profit analytics are computed by aggregating sales.

Cumulative percentages (70%, 60%) are NOT done in MongoDB.
They are handled by backend code.
Dates are real MongoDB date objects.
Year-based trends must use $year operator.
"#;

pub const INTENT_PROMPT: &str = r#"You are a classifier.

If the user asks about:
- revenue
- profit
- sales
- products
- quantities
- trends
- top selling

Then return analytics.

Otherwise return chat.

Return STRICT JSON inside <json></json> only.

<json>
{ "type":"analytics|chat" }
</json>

User Question:
"#;

const PIPELINE_RULES: &str = r#"You are a MongoDB aggregation expert.

Convert English analytics questions into MongoDB aggregation pipelines.

STRICT RULES:

- Return ONLY JSON ARRAY inside <json></json>
- Use double quotes only
- No explanations
- No markdown
- No JavaScript
- No ISODate
- Do NOT calculate percentages or cumulative logic
- Backend handles last N years filtering
- Case-insensitive text matching must use {"$regex":"<text>","$options":"i"}
"#;

const PIPELINE_GUIDE: &str = r#"Rules:

- Always $lookup products
- Always $unwind productInfo
- When grouping products, group by product name
- For revenue use "$sum":"$revenue"
- For profit use "$sum":"$profit"
- For trends use:

"_id":{"year":{"$year":"$date"}}

- For counting products:

"productCount":{"$addToSet":"$productInfo.name"}

Examples:

Revenue trend:

<json>
[
 {"$lookup":{"from":"products","localField":"productId","foreignField":"_id","as":"productInfo"}},
 {"$unwind":"$productInfo"},
 {"$group":{"_id":"$productInfo.name","totalRevenue":{"$sum":"$revenue"}}},
 {"$project":{"_id":0,"productName":"$_id","revenue":"$totalRevenue"}},
 {"$sort":{"revenue":-1}}
]
</json>

User Question:
"#;

pub const SUMMARY_PROMPT: &str = r#"You are a senior analytics architect.

Rules:
- ONLY use provided Mongo results
- NEVER invent numbers
- NEVER alter totals
- If question requires cumulative logic, say backend will handle it.
- Explain results clearly.

You MUST embed ALL product names and numeric values directly into imagePrompt.

Return STRICT JSON inside <json></json>.

Format:

<json>
{
 "summary":"short business explanation using Mongo values",
 "chart":"pie|bar|line",
 "imagePrompt":"Real BI dashboard showing EXACT MongoDB data: list each product with revenue and profit, labeled pie chart with percentages, bar chart with product vs revenue, line chart trend, KPI cards showing totals. MUST include these values explicitly:",
 "videoPrompt":"optional"
}
</json>

Mongo Results:
"#;

/// Pipeline prompt; the operator list is rendered from the allow-list
pub fn pipeline_prompt() -> String {
    let operators = StageOperator::ALL
        .iter()
        .map(|op| format!("\"{}\"", op.key()))
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "{}\nAllowed operators:\n{}\n\n{}",
        PIPELINE_RULES, operators, PIPELINE_GUIDE
    )
}
