//! Trait definition for an AST visitor which walks the tree in DFS order

use super::{
    Block, Expression, ExpressionKind, FunctionCallArgumentList, FunctionLiteral,
    FunctionParameter, FunctionParameterList, Identifier, Literal, Local, MapEntry, Statement,
    StatementKind, StringPart,
};

pub trait Visitor<'ast>: Sized {
    fn visit_function_parameter_list(&mut self, parameters: &'ast FunctionParameterList) {
        walk_function_parameter_list(self, parameters)
    }

    fn visit_function_parameter(&mut self, parameter: &'ast FunctionParameter) {
        walk_function_parameter(self, parameter)
    }

    fn visit_identifier(&mut self, _identifier: &'ast Identifier) {}

    fn visit_block(&mut self, block: &'ast Block) {
        walk_block(self, block)
    }

    fn visit_statement(&mut self, statement: &'ast Statement) {
        walk_statement(self, statement)
    }

    fn visit_local(&mut self, local: &'ast Local) {
        walk_local(self, local)
    }

    fn visit_expression(&mut self, expression: &'ast Expression) {
        walk_expression(self, expression)
    }

    fn visit_literal(&mut self, _literal: &'ast Literal) {}

    fn visit_map_entry(&mut self, entry: &'ast MapEntry) {
        walk_map_entry(self, entry)
    }

    fn visit_string_part(&mut self, part: &'ast StringPart) {
        walk_string_part(self, part)
    }

    fn visit_function_literal(&mut self, literal: &'ast FunctionLiteral) {
        walk_function_literal(self, literal)
    }

    fn visit_function_call_argument_list(&mut self, arguments: &'ast FunctionCallArgumentList) {
        walk_function_call_argument_list(self, arguments)
    }
}

pub fn walk_function_parameter_list<'a>(
    visitor: &mut impl Visitor<'a>,
    parameters: &'a FunctionParameterList,
) {
    for parameter in &parameters.parameters {
        visitor.visit_function_parameter(parameter)
    }
}

pub fn walk_function_parameter<'a>(
    visitor: &mut impl Visitor<'a>,
    parameter: &'a FunctionParameter,
) {
    if let Some(ty) = &parameter.ty {
        visitor.visit_identifier(ty);
    }

    visitor.visit_identifier(&parameter.name);
}

pub fn walk_block<'a>(visitor: &mut impl Visitor<'a>, block: &'a Block) {
    for statement in &block.statements {
        visitor.visit_statement(statement);
    }
}

pub fn walk_statement<'a>(visitor: &mut impl Visitor<'a>, statement: &'a Statement) {
    match &statement.kind {
        StatementKind::Local(local) => visitor.visit_local(local),
        StatementKind::Expression(expression) => visitor.visit_expression(expression),
        StatementKind::If {
            condition,
            positive,
            negative,
        } => {
            visitor.visit_expression(condition);
            visitor.visit_statement(positive);

            if let Some(negative) = negative {
                visitor.visit_statement(negative);
            }
        }
        StatementKind::While { condition, body } => {
            visitor.visit_expression(condition);
            visitor.visit_statement(body);
        }
        StatementKind::Return(expression) => {
            if let Some(expression) = expression {
                visitor.visit_expression(expression);
            }
        }
        StatementKind::Block(block) => visitor.visit_block(block),
        StatementKind::Empty => {}
    }
}

pub fn walk_local<'a>(visitor: &mut impl Visitor<'a>, local: &'a Local) {
    if let Some(ty) = &local.ty {
        visitor.visit_identifier(ty);
    }

    visitor.visit_identifier(&local.name);

    if let Some(initializer) = &local.initializer {
        visitor.visit_expression(initializer);
    }
}

pub fn walk_expression<'a>(visitor: &mut impl Visitor<'a>, expression: &'a Expression) {
    match &expression.kind {
        ExpressionKind::Literal(literal) => visitor.visit_literal(literal),
        ExpressionKind::Identifier(identifier) => visitor.visit_identifier(identifier),
        ExpressionKind::Grouping(inner) => visitor.visit_expression(inner),
        ExpressionKind::List(elements) => {
            for element in elements {
                visitor.visit_expression(element);
            }
        }
        ExpressionKind::Map(entries) => {
            for entry in entries {
                visitor.visit_map_entry(entry);
            }
        }
        ExpressionKind::StringInterpolation(parts) => {
            for part in parts {
                visitor.visit_string_part(part);
            }
        }
        ExpressionKind::FunctionLiteral(literal) => visitor.visit_function_literal(literal),
        ExpressionKind::FunctionCall { target, arguments } => {
            visitor.visit_expression(target);
            visitor.visit_function_call_argument_list(arguments);
        }
        ExpressionKind::Binary { lhs, rhs, .. } => {
            visitor.visit_expression(lhs);
            visitor.visit_expression(rhs);
        }
        ExpressionKind::Unary { operand, .. } => visitor.visit_expression(operand),
        ExpressionKind::Assignment { target, rhs }
        | ExpressionKind::OperatorAssignment { target, rhs, .. } => {
            visitor.visit_identifier(target);
            visitor.visit_expression(rhs);
        }
    }
}

pub fn walk_map_entry<'a>(visitor: &mut impl Visitor<'a>, entry: &'a MapEntry) {
    visitor.visit_expression(&entry.key);
    visitor.visit_expression(&entry.value);
}

pub fn walk_string_part<'a>(visitor: &mut impl Visitor<'a>, part: &'a StringPart) {
    match part {
        StringPart::Fragment(_) => {}
        StringPart::Expression(expression) => visitor.visit_expression(expression),
    }
}

pub fn walk_function_literal<'a>(visitor: &mut impl Visitor<'a>, literal: &'a FunctionLiteral) {
    visitor.visit_function_parameter_list(&literal.parameters);
    visitor.visit_block(&literal.body);
}

pub fn walk_function_call_argument_list<'a>(
    visitor: &mut impl Visitor<'a>,
    arguments: &'a FunctionCallArgumentList,
) {
    for argument in &arguments.arguments {
        visitor.visit_expression(argument);
    }
}
