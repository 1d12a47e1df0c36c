// Prompt constants for the market-data and estimation calls.
// Placeholders in `{braces}` are replaced before sending.

/// Market data prompt. Replace `{country}`, `{survey_years}`, `{json_only_instruction}`.
pub const MARKET_DATA_PROMPT_TEMPLATE: &str = r#"Find the current {survey_years} software developer hourly rates in {country}.
I need the average hourly rate in local currency for:
1. Junior Developer
2. Mid-level Developer
3. Senior Developer
4. DevOps Engineer

Also identify the local Currency Symbol and Currency Code (ISO 4217).

{json_only_instruction}

Return the data in this JSON structure:
{
  "country": "{country}",
  "currencySymbol": "string",
  "currencyCode": "string",
  "hourlyRates": {
    "junior": number,
    "mid": number,
    "senior": number,
    "devops": number
  },
  "sourceSummary": "A short sentence about where this data came from (e.g. 'Based on recent salary surveys from Glassdoor and Payscale in Germany')."
}"#;

/// System instruction for the estimation call.
pub const ESTIMATION_SYSTEM: &str = "\
You are a Senior Technical Project Manager and Solution Architect.
Your goal is to estimate software development costs and timelines.

CRITICAL RULES:
1. Total Cost:
   - Use the provided wage data.
   - Calculate total developer hours based on complexity.
   - Apply the wage rates to the hours.
   - \"min\" uses a Junior/Mid blend. \"max\" uses a Senior/Specialist blend. \"avg\" lies between them.
2. Component Allocation:
   - Calculate the total cost first, then strictly distribute it:
   - Backend: 40%
   - Frontend: 30%
   - DevOps: 20%
   - QA: 10%
3. Infrastructure & Licenses:
   - Estimate monthly cloud costs (AWS/GCP/Azure) based on the identified architecture.
   - Estimate third-party API and license costs (Auth0, Stripe, etc).
4. Timeline:
   - Be realistic. timelineWeeks.min must not exceed timelineWeeks.max.
5. Analyze the provided images (wireframes, diagrams) and documents deeply to identify features.";

/// Estimation task prompt. Replace `{country}`, `{currency_code}`, `{currency_symbol}`,
/// `{junior}`, `{mid}`, `{senior}`, `{devops}`, `{requirements}`, `{currency_instruction}`.
pub const ESTIMATION_PROMPT_TEMPLATE: &str = r#"Analyze the attached project documents/images.

Context:
- Target Country: {country}
- Currency: {currency_code} ({currency_symbol})
- Hourly Rates: Junior {junior}, Mid {mid}, Senior {senior}, DevOps {devops}.

User Requirements Text: "{requirements}"

{currency_instruction}

Generate a detailed JSON estimate matching this schema:
{
  "projectName": "string",
  "summary": "string (executive summary of scope)",
  "totalCost": { "min": number, "avg": number, "max": number },
  "timelineWeeks": { "min": number, "max": number },
  "componentCosts": { "backend": number, "frontend": number, "devops": number, "qa": number },
  "infrastructureCostMonthly": number,
  "thirdPartyLicensesCost": number,
  "assumptions": ["string", "string"]
}"#;
