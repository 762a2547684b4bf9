//! Prompt construction for the SQL agent.

/// Default number of rows the agent asks for when the user gives no count.
pub const TOP_K: usize = 10;

const SYSTEM_PROMPT_TEMPLATE: &str = r#"You are an agent designed to interact with a {dialect} database.
Given a question, write a syntactically correct {dialect} query, run it, look at the results and answer the question.

INSTRUCTIONS:
- Start by listing the tables, then look at the schema of the relevant tables.
- Unless the user asks for a specific number of rows, limit the query to {top_k} results.
- Order the results by a relevant column to return the most interesting rows.
- Only select the columns needed to answer the question, never all columns.
- Use the query checker on every query before running it.
- If a query fails, read the error, rewrite the query and try again.
- Never issue DML or DDL statements (INSERT, UPDATE, DELETE, DROP, ALTER, ...).
- Only use information returned by the tools to construct the final answer.
- If the question is not about the database, answer "I don't know".

Reply with the final answer in plain language once you have it."#;

const QUERY_CHECKER_TEMPLATE: &str = r#"{query}

Double check the {dialect} query above for common mistakes, including:
- Using NOT IN with NULL values
- Using UNION when UNION ALL should have been used
- Using BETWEEN for exclusive ranges
- Data type mismatch in predicates
- Properly quoting identifiers
- Using the correct number of arguments for functions
- Casting to the correct data type
- Using the proper columns for joins

If there are any of the above mistakes, rewrite the query. If there are no mistakes, reproduce the original query.
Output the final SQL query only."#;

/// Builds the agent's system prompt for a SQL dialect.
pub fn system_prompt(dialect: &str) -> String {
    SYSTEM_PROMPT_TEMPLATE
        .replace("{dialect}", dialect)
        .replace("{top_k}", &TOP_K.to_string())
}

/// Builds the prompt asking the model to review `query`.
pub fn query_checker_prompt(dialect: &str, query: &str) -> String {
    QUERY_CHECKER_TEMPLATE
        .replace("{query}", query.trim())
        .replace("{dialect}", dialect)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_mentions_dialect_and_limit() {
        let prompt = system_prompt("SQLite");
        assert!(prompt.contains("SQLite database"));
        assert!(prompt.contains("limit the query to 10 results"));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn test_query_checker_prompt() {
        let prompt = query_checker_prompt("MySQL", "  SELECT COUNT(*) FROM STUDENT  ");
        assert!(prompt.starts_with("SELECT COUNT(*) FROM STUDENT\n"));
        assert!(prompt.contains("Double check the MySQL query"));
    }
}
